pub mod fixtures;

pub use fixtures::{
    AsyncScriptedTransport, CollectingReporter, DeliveryLog, ScriptedTransport,
};
