//! Registry of connected devices
//!
//! One process can drive many terminals at once. Each entry is a fully
//! independent [`Device`] with its own session, reply numbering and receive
//! task; the registry only adds naming and a shared event channel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

use zklink_transport::Transport;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId};
use crate::options::{ConnectOptions, EVENT_CHANNEL_CAPACITY};

/// Connected devices by id
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Arc<Device>>>,
    events: broadcast::Sender<DeviceEvent>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            devices: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Connect over TCP as described by `options`
    pub async fn connect(&self, id: impl Into<DeviceId>, options: ConnectOptions) -> Result<Arc<Device>> {
        let transport = Box::new(options.tcp_transport());
        self.connect_with(id, transport, options).await
    }

    /// Connect over a caller-supplied transport
    pub async fn connect_with(
        &self,
        id: impl Into<DeviceId>,
        transport: Box<dyn Transport>,
        options: ConnectOptions,
    ) -> Result<Arc<Device>> {
        let id = id.into();
        if self.contains(&id) {
            return Err(Error::AlreadyRegistered(id.to_string()));
        }

        let device = Arc::new(Device::connect(id.clone(), transport, options, self.events.clone()).await?);

        let rejected = {
            let mut devices = self.devices.write();
            if devices.contains_key(&id) {
                true
            } else {
                devices.insert(id.clone(), device.clone());
                false
            }
        };

        // Lost a race with a concurrent connect under the same id
        if rejected {
            device.disconnect().await?;
            return Err(Error::AlreadyRegistered(id.to_string()));
        }

        info!(device = %id, "Registered ({} devices)", self.len());
        Ok(device)
    }

    pub fn get(&self, id: &DeviceId) -> Result<Arc<Device>> {
        self.devices
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownDevice(id.to_string()))
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Disconnect one device and remove it from the registry
    pub async fn disconnect(&self, id: &DeviceId) -> Result<()> {
        let device = self.remove(id)?;
        device.disconnect().await
    }

    /// Disconnect every device; every device is attempted and the first error is returned
    pub async fn disconnect_all(&self) -> Result<()> {
        let devices: Vec<Arc<Device>> = self.devices.write().drain().map(|(_, d)| d).collect();

        let mut first_error = None;
        for device in devices {
            if let Err(e) = device.disconnect().await {
                warn!(device = %device.id(), "Disconnect failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Restart a device and remove it from the registry
    pub async fn restart(&self, id: &DeviceId) -> Result<()> {
        let device = self.get(id)?;
        device.restart().await?;
        self.remove(id).map(|_| ())
    }

    /// Power a device off and remove it from the registry
    pub async fn power_off(&self, id: &DeviceId) -> Result<()> {
        let device = self.get(id)?;
        device.power_off().await?;
        self.remove(id).map(|_| ())
    }

    /// Real-time events from every registered device
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    fn remove(&self, id: &DeviceId) -> Result<Arc<Device>> {
        self.devices
            .write()
            .remove(id)
            .ok_or_else(|| Error::UnknownDevice(id.to_string()))
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
