//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `hardware`     | SensorPort         | embedded-hal digital inputs |
//! |                | ActuatorPort       | embedded-hal PWM, LED strips|
//! | `sim`          | SensorPort         | shared in-process panel     |
//! |                | ActuatorPort       | log output                  |
//! |                | FrameSource        | synthetic frames            |
//! |                | Classifier         | fixed label rotation        |
//! | `time`         | Clock, Sleeper     | `std::time::Instant`        |
//! | `image_store`  | ImageStore         | `<classified_dir>/<cat>/`   |
//! | `staging`      | UploadSink         | `<challenged_dir>/<cat>/`   |
//! | `kv_store`     | StoragePort        | in-memory map / files       |
//! | `config_file`  | ConfigPort         | JSON file                   |
//! | `log_sink`     | EventSink          | `log` facade                |

pub mod config_file;
pub mod hardware;
pub mod image_store;
pub mod kv_store;
pub mod log_sink;
pub mod sim;
pub mod staging;
pub mod time;
