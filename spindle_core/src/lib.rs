pub mod byte_stream;
pub mod codec;
pub mod config;
pub mod datasource;
pub mod error;
pub mod executor;
pub mod oracle;
pub mod random_source;
pub mod record;
pub mod shape;

pub use byte_stream::ByteStream;
pub use codec::{Data, Decode, Encode, Text};
pub use config::SpindleConfig;
pub use datasource::{DEFAULT_STREAM, Datasource, StreamId};
pub use error::DatasourceError;
pub use executor::{Execution, ExecutionStatus, InProcessExecutor};
pub use oracle::{CrashOracle, CrashReport, Oracle};
pub use random_source::RandomSource;
pub use record::{LENGTH_FIELD_WIDTH, Record, Records};
pub use shape::{Kind, ShapeError, Value, decode_shape, decode_value, encode_value, parse_shape};
