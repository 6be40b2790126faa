use async_trait::async_trait;
use mockall::mock;

use cxml_outbound::document::MessageType;
use cxml_outbound::error::Result;
use cxml_outbound::http_client::{Transport, TransportResponse};
use cxml_outbound::libxml2::ValidationResult;
use cxml_outbound::schema::SchemaValidator;

mock! {
    pub Endpoint {}

    #[async_trait]
    impl Transport for Endpoint {
        async fn post(&self, url: &str, body: String, user_agent: &str) -> Result<TransportResponse>;
    }
}

mock! {
    pub Validator {}

    #[async_trait]
    impl SchemaValidator for Validator {
        async fn check_well_formed(&self, xml: &str) -> Result<ValidationResult>;
        async fn validate(&self, message_type: MessageType, xml: &str) -> Result<()>;
    }
}

/// Validator that accepts everything
pub fn accepting_validator() -> MockValidator {
    let mut validator = MockValidator::new();
    validator
        .expect_check_well_formed()
        .returning(|_| Ok(ValidationResult::Valid));
    validator.expect_validate().returning(|_, _| Ok(()));
    validator
}

/// Transport that must never be called
pub fn unused_transport() -> MockEndpoint {
    let mut transport = MockEndpoint::new();
    transport.expect_post().times(0);
    transport
}
