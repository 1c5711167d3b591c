pub mod gateway;
pub mod transport;

// Re-export the clients so callers can build them from one place
pub use gateway::ApiGateway;
pub use transport::{ApiRequest, TransportClient};
