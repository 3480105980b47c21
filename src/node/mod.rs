pub mod context;
pub mod execute;
pub mod item;
pub mod params;
pub mod registry;

pub use context::ExecutionContext;
pub use execute::{ExecutionLoop, Invocation};
pub use item::{BinaryData, BinaryDataSink, InMemoryBinarySink, InputItem, ResultItem};
pub use params::{DisplayOptions, OperationSchema, ParameterDescriptor, ParameterKind};
pub use registry::{
    Operation, OperationDescriptor, OperationHandler, OperationKey, OperationRegistry, Resource,
};
