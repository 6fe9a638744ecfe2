use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::info;

use crate::{
    models::{CustomerEntity, CustomerUpdate},
    schema::customers,
    services::{ServiceError, ServiceResult},
};

pub async fn get_customer(
    conn: &mut AsyncPgConnection,
    customer_id: &str,
) -> ServiceResult<CustomerEntity> {
    customers::table
        .find(customer_id)
        .select(CustomerEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotFound("Customer"))
}

pub async fn update_customer(
    conn: &mut AsyncPgConnection,
    customer_id: &str,
    update: &CustomerUpdate,
) -> ServiceResult<CustomerEntity> {
    validate_customer_update(update)?;

    let customer = diesel::update(customers::table.find(customer_id))
        .set(update)
        .returning(CustomerEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotFound("Customer"))?;

    info!("Updated customer {}", customer.customer_id);
    Ok(customer)
}

/// Checks required fields and the Northwind column widths.
pub fn validate_customer_update(update: &CustomerUpdate) -> ServiceResult<()> {
    if update.company_name.trim().is_empty() {
        return Err(ServiceError::Validation("Company name is required".into()));
    }

    let fields: [(&str, Option<&str>, usize); 10] = [
        ("company_name", Some(update.company_name.as_str()), 40),
        ("contact_name", update.contact_name.as_deref(), 30),
        ("contact_title", update.contact_title.as_deref(), 30),
        ("address", update.address.as_deref(), 60),
        ("city", update.city.as_deref(), 15),
        ("region", update.region.as_deref(), 15),
        ("postal_code", update.postal_code.as_deref(), 10),
        ("country", update.country.as_deref(), 15),
        ("phone", update.phone.as_deref(), 24),
        ("fax", update.fax.as_deref(), 24),
    ];

    for (name, value, max) in fields {
        if value.is_some_and(|v| v.chars().count() > max) {
            return Err(ServiceError::Validation(format!(
                "{name} cannot exceed {max} characters"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> CustomerUpdate {
        CustomerUpdate {
            company_name: "Alfreds Futterkiste".into(),
            contact_name: Some("Maria Anders".into()),
            city: Some("Berlin".into()),
            postal_code: Some("12209".into()),
            country: Some("Germany".into()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_valid_update() {
        assert!(validate_customer_update(&update()).is_ok());
    }

    #[test]
    fn requires_company_name() {
        let update = CustomerUpdate {
            company_name: "  ".into(),
            ..update()
        };
        assert!(matches!(
            validate_customer_update(&update),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn enforces_column_widths() {
        let update = CustomerUpdate {
            city: Some("Llanfairpwllgwyngyll".into()),
            ..update()
        };
        let err = validate_customer_update(&update).unwrap_err();
        assert!(err.to_string().contains("city"));
    }
}
