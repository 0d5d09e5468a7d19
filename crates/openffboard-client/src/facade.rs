//! Name-based access to one device class.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use racing_wheel_openffboard_client::{CommandInvoker, TransportSession, SessionConfig};
//! # use racing_wheel_openffboard_client::link::mock::{MemoryDevice, MockConnector};
//! # use racing_wheel_openffboard_client::protocol::AXIS;
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(TransportSession::new(
//!     MockConnector::text_device(MemoryDevice::new()),
//!     SessionConfig::default(),
//! ));
//! session.connect().await?;
//! let invoker = CommandInvoker::new(session);
//! let axis = invoker.class(&AXIS).instance(0);
//! axis.set("power", 500u16).await?;
//! let power: u16 = axis.get("power").await?;
//! # Ok(())
//! # }
//! ```

use racing_wheel_hid_openffboard_protocol::{
    DeviceClassTable, FromValue, IntoValue, ParameterDescriptor,
};

use crate::error::{CommandError, CommandResult};
use crate::invoker::CommandInvoker;

/// One class table bound to an invoker and an optional instance.
///
/// Names are resolved through the table; a name the table does not list is
/// reported as [`CommandError::UnknownParameter`] and nothing is sent.
#[derive(Debug, Clone, Copy)]
pub struct ClassHandle<'a> {
    invoker: &'a CommandInvoker,
    table: &'static DeviceClassTable,
    instance: Option<u8>,
}

impl<'a> ClassHandle<'a> {
    pub(crate) fn new(invoker: &'a CommandInvoker, table: &'static DeviceClassTable) -> Self {
        Self {
            invoker,
            table,
            instance: None,
        }
    }

    /// Address a specific instance of the class.
    pub fn instance(self, instance: u8) -> Self {
        Self {
            instance: Some(instance),
            ..self
        }
    }

    pub fn table(&self) -> &'static DeviceClassTable {
        self.table
    }

    pub fn descriptor(&self, name: &str) -> CommandResult<&'static ParameterDescriptor> {
        self.table
            .find_by_name(name)
            .ok_or_else(|| CommandError::UnknownParameter {
                class: self.table.prefix,
                name: name.to_string(),
            })
    }

    pub async fn get<T: FromValue>(&self, name: &str) -> CommandResult<T> {
        let descriptor = self.descriptor(name)?;
        self.invoker.get(self.table, self.instance, descriptor).await
    }

    pub async fn get_at<T: FromValue>(&self, name: &str, address: u64) -> CommandResult<T> {
        let descriptor = self.descriptor(name)?;
        self.invoker
            .get_addressed(self.table, self.instance, descriptor, address)
            .await
    }

    pub async fn set<T: IntoValue>(&self, name: &str, value: T) -> CommandResult<bool> {
        let descriptor = self.descriptor(name)?;
        self.invoker
            .set(self.table, self.instance, descriptor, value)
            .await
    }

    pub async fn set_at<T: IntoValue>(
        &self,
        name: &str,
        value: T,
        address: u64,
    ) -> CommandResult<bool> {
        let descriptor = self.descriptor(name)?;
        self.invoker
            .set_addressed(self.table, self.instance, descriptor, value, address)
            .await
    }

    pub async fn info(&self, name: &str) -> CommandResult<String> {
        let descriptor = self.descriptor(name)?;
        self.invoker
            .get_info(self.table, self.instance, descriptor)
            .await
    }
}
