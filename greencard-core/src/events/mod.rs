//! Provider event payloads and the signed envelopes they arrive in.

mod details;
mod models;
mod signed;

pub use details::{TestEventDetails, VaccinationEventDetails};
pub use models::{
    Holder, Holder2, NegativeTest, RemoteEvents, RemoteEventsVaccinations, RemoteStatus,
    RemoteTestResult2, RemoteTestResult3, RemoteUnomi, TestEvent3, TestResult2, Vaccination,
    VaccinationEvent,
};
pub use signed::{SignatureVerifier, SignedResponse, SignedResponseError, SignedResponseWithModel};

#[cfg(test)]
pub(crate) use signed::test_support;
