//! Request and response bodies.
//!
//! Decimal inputs accept either a JSON string (`"12.50"`) or a number
//! (`12.5`); both go through the same fixed-point parser. Money leaves the
//! API as strings with two decimals, quantities in their shortest form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{
    CustomerInfo, Money, NewPayment, NewSale, PaymentMethod, Quantity, SaleAggregate, SaleItem,
    SalePayment, SaleStatus, ValidationError,
};
use tally_sales::AddItemRequest;

// =============================================================================
// Inputs
// =============================================================================

/// A decimal as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    fn as_text(&self) -> String {
        match self {
            DecimalInput::Text(text) => text.clone(),
            DecimalInput::Number(number) => number.to_string(),
        }
    }

    pub fn to_money(&self, field: &str) -> Result<Money, ValidationError> {
        Money::parse(field, &self.as_text())
    }

    pub fn to_quantity(&self, field: &str) -> Result<Quantity, ValidationError> {
        Quantity::parse(field, &self.as_text())
    }
}

fn optional_money(input: &Option<DecimalInput>, field: &str) -> Result<Option<Money>, ValidationError> {
    input.as_ref().map(|value| value.to_money(field)).transpose()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSaleBody {
    pub operator_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_tax_id: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
}

impl OpenSaleBody {
    /// `header_operator` (from `x-operator-id`) wins over the body field.
    pub fn into_new_sale(self, header_operator: Option<String>) -> NewSale {
        NewSale {
            operator_id: header_operator.or(self.operator_id).unwrap_or_default(),
            customer: CustomerInfo {
                name: self.customer_name,
                tax_id: self.customer_tax_id,
                email: self.customer_email,
            },
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub product_id: String,
    pub quantity: DecimalInput,
    pub unit_price: Option<DecimalInput>,
    pub discount_value: Option<DecimalInput>,
    pub tax_value: Option<DecimalInput>,
}

impl TryFrom<AddItemBody> for AddItemRequest {
    type Error = ValidationError;

    fn try_from(body: AddItemBody) -> Result<Self, Self::Error> {
        Ok(AddItemRequest {
            quantity: body.quantity.to_quantity("quantity")?,
            unit_price: optional_money(&body.unit_price, "unit_price")?,
            discount_value: optional_money(&body.discount_value, "discount_value")?,
            tax_value: optional_money(&body.tax_value, "tax_value")?,
            product_id: body.product_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentBody {
    pub method: String,
    pub amount: DecimalInput,
    pub transaction_reference: Option<String>,
}

impl TryFrom<AddPaymentBody> for NewPayment {
    type Error = ValidationError;

    fn try_from(body: AddPaymentBody) -> Result<Self, Self::Error> {
        Ok(NewPayment {
            method: body.method.parse::<PaymentMethod>()?,
            amount: body.amount.to_money("amount")?,
            transaction_reference: body.transaction_reference,
        })
    }
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemResponse {
    pub id: String,
    pub sequence: i64,
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_label: String,
    pub quantity: String,
    pub unit_price: String,
    pub discount_value: String,
    pub tax_value: String,
    pub gross_total: String,
    pub net_total: String,
    pub created_at: DateTime<Utc>,
}

impl From<&SaleItem> for SaleItemResponse {
    fn from(item: &SaleItem) -> Self {
        SaleItemResponse {
            id: item.id.clone(),
            sequence: item.sequence,
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            sku: item.sku.clone(),
            unit_label: item.unit_label.clone(),
            quantity: item.quantity.to_string(),
            unit_price: item.unit_price.to_string(),
            discount_value: item.discount_value.to_string(),
            tax_value: item.tax_value.to_string(),
            gross_total: item.gross_total.to_string(),
            net_total: item.net_total.to_string(),
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePaymentResponse {
    pub id: String,
    pub sequence: i64,
    pub method: PaymentMethod,
    pub amount: String,
    pub transaction_reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl From<&SalePayment> for SalePaymentResponse {
    fn from(payment: &SalePayment) -> Self {
        SalePaymentResponse {
            id: payment.id.clone(),
            sequence: payment.sequence,
            method: payment.method,
            amount: payment.amount.to_string(),
            transaction_reference: payment.transaction_reference.clone(),
            paid_at: payment.paid_at,
        }
    }
}

/// Full sale snapshot returned by every sale endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: String,
    pub receipt_number: String,
    pub status: SaleStatus,
    pub operator_id: String,
    pub customer_name: Option<String>,
    pub customer_tax_id: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub total_gross: String,
    pub total_discount: String,
    pub total_tax: String,
    pub total_net: String,
    pub total_paid: String,
    pub change_due: String,
    pub balance_due: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub items: Vec<SaleItemResponse>,
    pub payments: Vec<SalePaymentResponse>,
}

impl From<&SaleAggregate> for SaleResponse {
    fn from(aggregate: &SaleAggregate) -> Self {
        let sale = aggregate.sale();
        SaleResponse {
            id: sale.id.clone(),
            receipt_number: sale.receipt_number.clone(),
            status: sale.status,
            operator_id: sale.operator_id.clone(),
            customer_name: sale.customer_name.clone(),
            customer_tax_id: sale.customer_tax_id.clone(),
            customer_email: sale.customer_email.clone(),
            notes: sale.notes.clone(),
            total_gross: sale.total_gross.to_string(),
            total_discount: sale.total_discount.to_string(),
            total_tax: sale.total_tax.to_string(),
            total_net: sale.total_net.to_string(),
            total_paid: sale.total_paid.to_string(),
            change_due: sale.change_due.to_string(),
            balance_due: aggregate.balance_due().to_string(),
            opened_at: sale.opened_at,
            closed_at: sale.closed_at,
            items: aggregate.items().iter().map(SaleItemResponse::from).collect(),
            payments: aggregate
                .payments()
                .iter()
                .map(SalePaymentResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_input_accepts_strings_and_numbers() {
        let body: AddItemBody = serde_json::from_str(
            r#"{"productId":"p-1","quantity":1.5,"unitPrice":"120","discountValue":10}"#,
        )
        .unwrap();
        let request = AddItemRequest::try_from(body).unwrap();

        assert_eq!(request.quantity, Quantity::from_milli(1500));
        assert_eq!(request.unit_price, Some(Money::from_cents(12000)));
        assert_eq!(request.discount_value, Some(Money::from_cents(1000)));
        assert_eq!(request.tax_value, None);
    }

    #[test]
    fn test_too_precise_quantity_rejected() {
        let body: AddItemBody =
            serde_json::from_str(r#"{"productId":"p-1","quantity":"0.0005"}"#).unwrap();
        assert!(AddItemRequest::try_from(body).is_err());
    }

    #[test]
    fn test_payment_method_parsed() {
        let body: AddPaymentBody =
            serde_json::from_str(r#"{"method":"PIX","amount":"10.00"}"#).unwrap();
        let payment = NewPayment::try_from(body).unwrap();
        assert_eq!(payment.method, PaymentMethod::Pix);

        let body: AddPaymentBody =
            serde_json::from_str(r#"{"method":"cheque","amount":"10.00"}"#).unwrap();
        assert!(NewPayment::try_from(body).is_err());
    }

    #[test]
    fn test_header_operator_wins() {
        let body = OpenSaleBody {
            operator_id: Some("body-op".to_string()),
            ..Default::default()
        };
        assert_eq!(
            body.clone().into_new_sale(Some("header-op".to_string())).operator_id,
            "header-op"
        );
        assert_eq!(body.into_new_sale(None).operator_id, "body-op");
    }
}
