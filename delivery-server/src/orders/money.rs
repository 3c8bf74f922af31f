//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to
//! `f64` for storage/serialization. 金额在下单时一次性冻结，之后
//! 引用的配置（税率、配送费）变更不影响历史订单。

use rust_decimal::prelude::*;

use crate::core::ChargeConfig;
use crate::db::models::OrderItem;
use crate::utils::AppError;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

/// 下单时冻结的金额拆分
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub tax_amount: f64,
    pub final_amount: f64,
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

fn to_decimal(value: f64, field_name: &str) -> Result<Decimal, AppError> {
    Decimal::from_f64(value)
        .ok_or_else(|| AppError::validation(format!("{} is not representable: {}", field_name, value)))
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate a line item before pricing
pub fn validate_item(name: &str, price: f64, quantity: i32) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("item name must not be empty"));
    }
    require_finite(price, "price")?;
    if price < 0.0 {
        return Err(AppError::validation(format!(
            "price must be non-negative, got {}",
            price
        )));
    }
    if price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, price
        )));
    }
    if quantity < 1 {
        return Err(AppError::validation(format!(
            "quantity must be at least 1, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

/// 行小计 = 单价 × 数量（2 位小数，四舍五入）
pub fn line_total(price: f64, quantity: i32) -> Result<f64, AppError> {
    let total = to_decimal(price, "price")? * Decimal::from(quantity);
    round2(total)
        .to_f64()
        .ok_or_else(|| AppError::internal("line total out of range"))
}

/// 计算订单金额拆分
///
/// 不变量：`final_amount = subtotal + delivery_fee + tax_amount - discount`。
/// 折扣额度由优惠来源负责封顶；这里只拒绝会把总额打成负数的折扣。
/// 打包/手续费并入 delivery_fee 一项。
pub fn compute_totals(
    items: &[OrderItem],
    charges: &ChargeConfig,
    discount: f64,
) -> Result<Totals, AppError> {
    require_finite(discount, "discount")?;
    if discount < 0.0 {
        return Err(AppError::validation("discount must be non-negative"));
    }

    let mut subtotal = Decimal::ZERO;
    for item in items {
        subtotal += to_decimal(item.line_total, "line_total")?;
    }
    let subtotal = round2(subtotal);

    let delivery_fee = round2(
        to_decimal(charges.delivery_fee, "delivery_fee")?
            + to_decimal(charges.handling_charge, "handling_charge")?,
    );
    let tax_amount = round2(
        subtotal * to_decimal(charges.tax_percent, "tax_percent")? / Decimal::from(100),
    );
    let discount_dec = round2(to_decimal(discount, "discount")?);

    let final_amount = subtotal + delivery_fee + tax_amount - discount_dec;
    if final_amount < Decimal::ZERO {
        return Err(AppError::validation(format!(
            "discount {} exceeds order total",
            discount
        )));
    }

    Ok(Totals {
        subtotal: subtotal.to_f64().unwrap_or(0.0),
        delivery_fee: delivery_fee.to_f64().unwrap_or(0.0),
        discount: discount_dec.to_f64().unwrap_or(0.0),
        tax_amount: tax_amount.to_f64().unwrap_or(0.0),
        final_amount: final_amount.to_f64().unwrap_or(0.0),
    })
}
