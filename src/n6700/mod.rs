pub mod address;
pub mod cache;
pub mod driver;
pub mod interface;
pub mod modules;
pub mod protocol;
pub mod transport;

// Re-export the main types
pub use address::{Channel, ChannelAddresses, ChannelList};
pub use cache::{Attribute, CacheValue, CachedValue, InvalidationScope, PropertyCache};
pub use driver::{ChannelStatus, N6700};
pub use interface::{BatchAddressable, RangedProperty};
pub use modules::{ModuleSpec, ModuleTable, OutputRange};
pub use protocol::Protocol;
pub use transport::{
    ConnectionConfig, DEFAULT_SCPI_PORT, MockTransport, ScpiTransport, TcpTransport,
    TcpTransportBuilder,
};
