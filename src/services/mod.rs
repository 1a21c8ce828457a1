// Core services
pub mod orders;

// Payment services
pub mod checkout;
pub mod payment_gateway;
pub mod reconciliation;
