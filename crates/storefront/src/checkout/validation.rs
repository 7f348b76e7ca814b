//! Local validation of checkout form input.
//!
//! Nothing here touches the network; a form that fails validation blocks
//! the forward transition before any remote call is made.

use std::fmt;

use vitrine_core::{Address, PostalCode, RegionCode};

use super::CheckoutError;
use crate::api::{CardPayload, PostalLookup};

const CARD_NUMBER_MIN_DIGITS: usize = 13;
const HOLDER_NAME_MIN_CHARS: usize = 2;
const EXPIRY_CHARS: usize = 5;

// =============================================================================
// Address
// =============================================================================

/// Address field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    PostalCode,
    Street,
    Number,
    Neighborhood,
    City,
    Region,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostalCode => write!(f, "postal code"),
            Self::Street => write!(f, "street"),
            Self::Number => write!(f, "number"),
            Self::Neighborhood => write!(f, "neighborhood"),
            Self::City => write!(f, "city"),
            Self::Region => write!(f, "region"),
        }
    }
}

/// Raw address input as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressForm {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub region: String,
}

impl AddressForm {
    /// Pre-fill the form from a stored address.
    #[must_use]
    pub fn from_address(address: &Address) -> Self {
        Self {
            postal_code: address.postal_code.masked(),
            street: address.street.clone(),
            number: address.number.clone(),
            complement: address.complement.clone().unwrap_or_default(),
            neighborhood: address.neighborhood.clone(),
            city: address.city.clone(),
            region: address.region.as_str().to_string(),
        }
    }

    /// Copy the fragments a postal code lookup returned into the form.
    ///
    /// Fields the lookup left blank keep whatever the shopper typed.
    pub fn apply_lookup(&mut self, lookup: &PostalLookup) {
        fn fill(field: &mut String, value: Option<&str>) {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                *field = value.to_string();
            }
        }

        fill(&mut self.street, lookup.street.as_deref());
        fill(&mut self.neighborhood, lookup.neighborhood.as_deref());
        fill(&mut self.city, lookup.city.as_deref());
        fill(&mut self.region, lookup.region.as_deref());
    }

    /// Validate every field and build an [`Address`].
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidAddress` listing every offending field.
    pub fn validate(&self) -> Result<Address, CheckoutError> {
        let mut invalid = Vec::new();

        let postal_code = PostalCode::parse(&self.postal_code)
            .map_err(|_| invalid.push(AddressField::PostalCode))
            .ok();

        let mut required = |value: &str, field: AddressField| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                invalid.push(field);
            }
            trimmed.to_string()
        };
        let street = required(&self.street, AddressField::Street);
        let number = required(&self.number, AddressField::Number);
        let neighborhood = required(&self.neighborhood, AddressField::Neighborhood);
        let city = required(&self.city, AddressField::City);

        let region = RegionCode::parse(&self.region)
            .map_err(|_| invalid.push(AddressField::Region))
            .ok();

        match (postal_code, region) {
            (Some(postal_code), Some(region)) if invalid.is_empty() => {
                let complement = self.complement.trim();
                Ok(Address {
                    postal_code,
                    street,
                    number,
                    complement: (!complement.is_empty()).then(|| complement.to_string()),
                    neighborhood,
                    city,
                    region,
                })
            }
            _ => Err(CheckoutError::InvalidAddress(invalid)),
        }
    }
}

/// Validate an address form.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidAddress` listing every offending field.
pub fn validate_address(form: &AddressForm) -> Result<Address, CheckoutError> {
    form.validate()
}

// =============================================================================
// Card
// =============================================================================

/// Card field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardField {
    Number,
    HolderName,
    Expiry,
    Cvv,
}

impl fmt::Display for CardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "card number"),
            Self::HolderName => write!(f, "holder name"),
            Self::Expiry => write!(f, "expiry"),
            Self::Cvv => write!(f, "CVV"),
        }
    }
}

/// Card fields entered on the payment step.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub holder_name: String,
    /// `MM/YY`.
    pub expiry: String,
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &"[REDACTED]")
            .field("holder_name", &self.holder_name)
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl CardDetails {
    /// Card number with whitespace removed.
    #[must_use]
    pub fn normalized_number(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace()).collect()
    }

    pub(crate) fn to_payload(&self) -> CardPayload {
        CardPayload {
            number: self.normalized_number(),
            holder_name: self.holder_name.trim().to_string(),
            expiry: self.expiry.clone(),
            cvv: self.cvv.clone(),
        }
    }
}

/// Check the format of every card field.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidCard` listing every offending field.
pub fn validate_card(card: &CardDetails) -> Result<(), CheckoutError> {
    let mut invalid = Vec::new();

    let number = card.normalized_number();
    if number.len() < CARD_NUMBER_MIN_DIGITS || !number.chars().all(|c| c.is_ascii_digit()) {
        invalid.push(CardField::Number);
    }
    if card.holder_name.trim().chars().count() < HOLDER_NAME_MIN_CHARS {
        invalid.push(CardField::HolderName);
    }
    if card.expiry.chars().count() != EXPIRY_CHARS {
        invalid.push(CardField::Expiry);
    }
    if !(3..=4).contains(&card.cvv.len()) || !card.cvv.chars().all(|c| c.is_ascii_digit()) {
        invalid.push(CardField::Cvv);
    }

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(CheckoutError::InvalidCard(invalid))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_card() -> CardDetails {
        CardDetails {
            number: "4111 1111 1111 1111".to_string(),
            holder_name: "Ana Souza".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
        }
    }

    fn valid_form() -> AddressForm {
        AddressForm {
            postal_code: "01310-100".to_string(),
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            complement: "  ".to_string(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            region: "sp".to_string(),
        }
    }

    fn card_errors(card: &CardDetails) -> Vec<CardField> {
        match validate_card(card) {
            Err(CheckoutError::InvalidCard(fields)) => fields,
            other => panic!("expected InvalidCard, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_card_passes() {
        assert!(validate_card(&valid_card()).is_ok());
        let amex = CardDetails {
            number: "3782 822463 10005".to_string(),
            cvv: "1234".to_string(),
            ..valid_card()
        };
        assert!(validate_card(&amex).is_ok());
    }

    #[test]
    fn test_short_card_number_rejected() {
        let card = CardDetails {
            number: "4111".to_string(),
            ..valid_card()
        };
        assert_eq!(card_errors(&card), vec![CardField::Number]);
    }

    #[test]
    fn test_thirteen_digits_is_enough() {
        let card = CardDetails {
            number: "4222 2222 2222 2".to_string(),
            ..valid_card()
        };
        assert!(validate_card(&card).is_ok());
    }

    #[test]
    fn test_card_reports_every_bad_field() {
        let card = CardDetails {
            number: "4111-1111-1111-1111".to_string(),
            holder_name: " A ".to_string(),
            expiry: "1/30".to_string(),
            cvv: "12a".to_string(),
        };
        assert_eq!(
            card_errors(&card),
            vec![
                CardField::Number,
                CardField::HolderName,
                CardField::Expiry,
                CardField::Cvv
            ]
        );
    }

    #[test]
    fn test_cvv_length_bounds() {
        for (cvv, ok) in [("12", false), ("123", true), ("1234", true), ("12345", false)] {
            let card = CardDetails {
                cvv: cvv.to_string(),
                ..valid_card()
            };
            assert_eq!(validate_card(&card).is_ok(), ok, "cvv {cvv}");
        }
    }

    #[test]
    fn test_card_debug_redacts() {
        let debug = format!("{:?}", valid_card());
        assert!(!debug.contains("4111"));
        assert!(debug.contains("Ana Souza"));
    }

    #[test]
    fn test_payload_strips_spaces() {
        let payload = valid_card().to_payload();
        assert_eq!(payload.number, "4111111111111111");
    }

    #[test]
    fn test_address_form_validates() {
        let address = valid_form().validate().unwrap();
        assert_eq!(address.postal_code.as_str(), "01310100");
        assert_eq!(address.region.as_str(), "SP");
        assert_eq!(address.complement, None);
    }

    #[test]
    fn test_address_form_lists_missing_fields() {
        let form = AddressForm {
            postal_code: "0131".to_string(),
            city: String::new(),
            region: "S".to_string(),
            ..valid_form()
        };
        match form.validate() {
            Err(CheckoutError::InvalidAddress(fields)) => assert_eq!(
                fields,
                vec![
                    AddressField::PostalCode,
                    AddressField::City,
                    AddressField::Region
                ]
            ),
            other => panic!("expected InvalidAddress, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_lookup_keeps_typed_values_for_blanks() {
        let mut form = AddressForm {
            street: "Rua Typed".to_string(),
            city: "Typed City".to_string(),
            ..AddressForm::default()
        };
        form.apply_lookup(&PostalLookup {
            street: Some("Av. Paulista".to_string()),
            neighborhood: Some("Bela Vista".to_string()),
            city: Some("  ".to_string()),
            region: None,
        });
        assert_eq!(form.street, "Av. Paulista");
        assert_eq!(form.neighborhood, "Bela Vista");
        assert_eq!(form.city, "Typed City");
        assert_eq!(form.region, "");
    }

    #[test]
    fn test_form_roundtrips_address() {
        let address = valid_form().validate().unwrap();
        let form = AddressForm::from_address(&address);
        assert_eq!(form.postal_code, "01310-100");
        assert_eq!(form.validate().unwrap(), address);
    }
}
