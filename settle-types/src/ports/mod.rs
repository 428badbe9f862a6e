//! Port traits that adapters must implement.

mod provider;
mod repository;

pub use provider::{
    CardLink, ChargeContext, PaymentLookup, PaymentProvider, PixCharge, ProviderCredentials,
    ProviderFactory, ProviderIdentity,
};
pub use repository::{FinalizeRequest, SettlementOutcome, SettlementRepository};
