// Test data builders.
//
// Ids are random so suites can share one store without colliding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use solartrust::modules::gateways::{Quote, QuoteStatus, SystemSpecs};
use solartrust::modules::payments::models::BankDetails;
use solartrust::modules::reviews::models::ReviewInput;

/// Approved quote owned by `user_id`
pub fn quote_for(user_id: &str, contractor_id: &str, base_price: Decimal) -> Quote {
    Quote {
        id: format!("quote-{}", Uuid::new_v4()),
        request_id: format!("request-{}", Uuid::new_v4()),
        contractor_id: contractor_id.to_string(),
        user_id: user_id.to_string(),
        admin_status: QuoteStatus::Approved,
        base_price,
        system_specs: SystemSpecs {
            system_size_kwp: dec!(8.5),
        },
        converted_to_project: false,
    }
}

pub fn bank_details() -> BankDetails {
    BankDetails {
        bank_name: "Al Rajhi Bank".to_string(),
        account_holder: "Sunrise Solar Installers".to_string(),
        iban: "SA0380000000608010167519".to_string(),
    }
}

pub fn five_star_review() -> ReviewInput {
    ReviewInput {
        rating: 5,
        quality_rating: Some(5),
        timeliness_rating: Some(4),
        communication_rating: Some(5),
        professionalism_rating: Some(5),
        comment: Some("Panels installed cleanly and on time".to_string()),
    }
}
