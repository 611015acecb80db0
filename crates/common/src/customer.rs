//! Customer shapes on both sides of the CQRS split.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CustomerId;

/// Errors raised while validating or projecting customers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    /// A required field is empty or whitespace.
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// The country is not one of the supported countries.
    #[error("Unsupported country: '{0}'")]
    UnsupportedCountry(String),

    /// The authoritative record has no country, so it has no partition key.
    #[error("Customer {0} has no country and cannot be projected")]
    MissingCountry(CustomerId),
}

/// Countries supported by the sample domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    Peru,
    Chile,
}

impl Country {
    pub const ALL: [Country; 2] = [Country::Peru, Country::Chile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Peru => "Peru",
            Country::Chile => "Chile",
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Country {
    type Err = CustomerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "peru" | "perú" => Ok(Country::Peru),
            "chile" => Ok(Country::Chile),
            _ => Err(CustomerError::UnsupportedCountry(s.to_string())),
        }
    }
}

/// Input for creating an authoritative customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub tax_id: String,
    pub city: String,
    pub country: Country,
}

impl NewCustomer {
    pub fn new(
        name: impl Into<String>,
        tax_id: impl Into<String>,
        city: impl Into<String>,
        country: Country,
    ) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
            city: city.into(),
            country,
        }
    }

    /// Checks that every text field carries a value.
    pub fn validate(&self) -> Result<(), CustomerError> {
        if self.name.trim().is_empty() {
            return Err(CustomerError::EmptyField("name"));
        }
        if self.tax_id.trim().is_empty() {
            return Err(CustomerError::EmptyField("tax_id"));
        }
        if self.city.trim().is_empty() {
            return Err(CustomerError::EmptyField("city"));
        }
        Ok(())
    }
}

/// An authoritative customer row as read back from the write store.
///
/// Optional columns stay optional here: rows written by other tools may
/// lack them, and the sync handler decides what to do about that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub tax_id: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl CustomerRecord {
    /// Returns the country if it is usable as a partition key.
    pub fn partition_key(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Denormalized customer document held by the read store.
///
/// `id` is the document key and `pais` the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProjection {
    pub id: String,
    pub nombre: String,
    pub ruc: Option<String>,
    pub ciudad: Option<String>,
    pub pais: String,
}

impl CustomerProjection {
    /// Builds the read-model document for an authoritative record.
    pub fn from_record(record: &CustomerRecord) -> Result<Self, CustomerError> {
        let pais = record
            .partition_key()
            .ok_or(CustomerError::MissingCountry(record.id))?;

        Ok(Self {
            id: record.id.to_string(),
            nombre: record.name.clone(),
            ruc: record.tax_id.clone(),
            ciudad: record.city.clone(),
            pais: pais.to_string(),
        })
    }

    pub fn partition_key(&self) -> &str {
        &self.pais
    }

    /// Case-insensitive substring match against name, tax id and city.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(needle);
        contains(self.nombre.as_str())
            || self.ruc.as_deref().is_some_and(contains)
            || self.ciudad.as_deref().is_some_and(contains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: Option<&str>) -> CustomerRecord {
        CustomerRecord {
            id: CustomerId::new(7),
            name: "Acme SAC 42".to_string(),
            tax_id: Some("12345678-3".to_string()),
            city: Some("Lima".to_string()),
            country: country.map(String::from),
        }
    }

    #[test]
    fn country_parses_case_insensitively() {
        assert_eq!("peru".parse::<Country>().unwrap(), Country::Peru);
        assert_eq!("Perú".parse::<Country>().unwrap(), Country::Peru);
        assert_eq!(" CHILE ".parse::<Country>().unwrap(), Country::Chile);
    }

    #[test]
    fn country_rejects_unknown_names() {
        assert_eq!(
            "Bolivia".parse::<Country>(),
            Err(CustomerError::UnsupportedCountry("Bolivia".to_string()))
        );
    }

    #[test]
    fn new_customer_requires_all_fields() {
        let ok = NewCustomer::new("Acme", "1-1", "Lima", Country::Peru);
        assert!(ok.validate().is_ok());

        let blank_name = NewCustomer::new("  ", "1-1", "Lima", Country::Peru);
        assert_eq!(blank_name.validate(), Err(CustomerError::EmptyField("name")));

        let blank_city = NewCustomer::new("Acme", "1-1", "", Country::Peru);
        assert_eq!(blank_city.validate(), Err(CustomerError::EmptyField("city")));
    }

    #[test]
    fn projection_copies_record_fields() {
        let projection = CustomerProjection::from_record(&record(Some("Peru"))).unwrap();
        assert_eq!(
            projection,
            CustomerProjection {
                id: "7".to_string(),
                nombre: "Acme SAC 42".to_string(),
                ruc: Some("12345678-3".to_string()),
                ciudad: Some("Lima".to_string()),
                pais: "Peru".to_string(),
            }
        );
    }

    #[test]
    fn projection_requires_country() {
        for country in [None, Some(""), Some("   ")] {
            assert_eq!(
                CustomerProjection::from_record(&record(country)),
                Err(CustomerError::MissingCountry(CustomerId::new(7)))
            );
        }
    }

    #[test]
    fn projection_serializes_with_document_field_names() {
        let projection = CustomerProjection::from_record(&record(Some("Peru"))).unwrap();
        let json = serde_json::to_value(&projection).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "7",
                "nombre": "Acme SAC 42",
                "ruc": "12345678-3",
                "ciudad": "Lima",
                "pais": "Peru"
            })
        );
    }

    #[test]
    fn substring_match_ignores_case_and_null_fields() {
        let mut projection = CustomerProjection::from_record(&record(Some("Peru"))).unwrap();
        assert!(projection.matches_lowercase("acme"));
        assert!(projection.matches_lowercase("5678-3"));
        assert!(projection.matches_lowercase("lim"));
        assert!(!projection.matches_lowercase("peru"));

        projection.ciudad = None;
        assert!(!projection.matches_lowercase("lim"));
    }
}
