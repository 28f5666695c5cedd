//! Credential issuance and reading on top of the native credential primitive.

mod attributes;
mod engine;
mod primitive;

pub use attributes::{
    DccName, DccRecovery, DccTest, DccVaccination, DigitalCovidCertificate, DomesticAttributes,
    EuropeanCredential, IssuedDomesticCredential,
};
pub use engine::{CredentialEngine, HolderSecretKey};
pub use primitive::CredentialPrimitive;

#[cfg(test)]
pub(crate) use primitive::test_support;
