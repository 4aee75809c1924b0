pub mod config;
pub mod error;
pub mod n6700;
pub mod types;

pub use error::N6700Error;
pub use n6700::{
    Attribute, BatchAddressable, CacheValue, CachedValue, Channel, ChannelAddresses, ChannelList,
    ChannelStatus, ConnectionConfig, DEFAULT_SCPI_PORT, InvalidationScope, MockTransport,
    ModuleSpec, ModuleTable, N6700, OutputRange, PropertyCache, Protocol, RangedProperty,
    ScpiTransport, TcpTransport, TcpTransportBuilder,
};
pub use types::{
    CurrentLimitBehavior, DisplayMode, MeasurementKind, OutputDelay, PinFunction, PinPolarity,
    SlewRate, TriggerSource, parse_option,
};
