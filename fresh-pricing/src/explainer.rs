use fresh_shared::{FactorTag, ProductSnapshot};

/// Describe the conditions behind a model-based price.
///
/// Tags come out in evaluation order: expiry, stock, demand, sales velocity,
/// then the combined conditions. Overlapping buckets are reported as they
/// fire; nothing is deduplicated. The predicted price is not consulted.
pub fn explain(snapshot: &ProductSnapshot, _predicted_price: f64) -> Vec<FactorTag> {
    let mut factors = Vec::new();

    let days = snapshot.days_to_expiry();
    let stock = snapshot.stock_level();
    let demand = snapshot.demand_score();
    let sales = snapshot.historical_sales();

    if days <= 0 {
        factors.push(FactorTag::ExpiredClearance);
    } else if days <= 1 {
        factors.push(FactorTag::CriticalExpiry);
    } else if days <= 3 {
        factors.push(FactorTag::ExpiryProximity);
    } else if days <= 7 {
        factors.push(FactorTag::ShortShelfLife);
    }

    if stock > 200 {
        factors.push(FactorTag::ExcessInventory);
    } else if stock > 100 {
        factors.push(FactorTag::HighStock);
    } else {
        if stock < 20 {
            factors.push(FactorTag::LowStock);
        }
        if stock < 10 {
            factors.push(FactorTag::CriticalStock);
        }
    }

    if demand < 0.2 {
        factors.push(FactorTag::LowDemand);
    } else {
        if demand > 0.8 {
            factors.push(FactorTag::HighDemand);
        }
        if demand > 0.9 {
            factors.push(FactorTag::PeakDemand);
        }
    }

    if sales < 10.0 {
        factors.push(FactorTag::SlowMoving);
    } else if sales > 100.0 {
        factors.push(FactorTag::FastMoving);
    }

    if days <= 3 && stock > 100 {
        factors.push(FactorTag::UrgentClearanceNeeded);
    }
    if stock < 20 && demand > 0.7 {
        factors.push(FactorTag::ScarcityPremium);
    }

    factors
}
