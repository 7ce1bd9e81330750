// Provider clients and the transport they share

pub mod claude;
pub mod openai;
pub mod provider_base;
pub mod provider_handle;
pub mod settings;
pub mod transport;
