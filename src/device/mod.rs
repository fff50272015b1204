use crate::{
    prelude::*,
    vfs::{
        file::OpenFlags,
        node::{Error, NodeRef},
    },
};
use hashbrown::HashMap;

pub mod console;

/// A device that can be opened through its name, like the console.
pub trait Device: Send + Sync {
    /// Open the device. Each successful open is balanced by a [`crate::vfs::Node::close`]
    /// on the returned node, once it is dropped.
    ///
    /// # Errors
    /// If the device cannot be opened with the given flags, an error is returned,
    /// described by the [`Error`] enum.
    fn open(self: Arc<Self>, flags: OpenFlags) -> Result<NodeRef, Error>;
}

/// The devices known by the kernel, indexed by their name. The name of a device does
/// not include the colon used to designate it in a path: the console, opened with
/// `con:`, is registered as `con`.
#[derive(Default)]
pub struct Registry {
    devices: Spinlock<HashMap<String, Arc<dyn Device>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under the given name.
    ///
    /// # Errors
    /// Returns [`AlreadyRegistered`] if a device is already registered with this name.
    /// The registered device is left untouched in this case.
    pub fn register(
        &self,
        name: impl Into<String>,
        device: Arc<dyn Device>,
    ) -> Result<(), AlreadyRegistered> {
        let name = name.into();
        let mut devices = self.devices.lock();
        if devices.contains_key(&name) {
            return Err(AlreadyRegistered);
        }

        log::info!("Registered device {name:?}");
        devices.insert(name, device);
        Ok(())
    }

    /// Open the device with the given name.
    ///
    /// # Errors
    /// Returns [`Error::NoSuchFile`] if no device is registered with this name, or the
    /// error returned by the device itself.
    pub fn open(&self, name: &str, flags: OpenFlags) -> Result<NodeRef, Error> {
        let device = self
            .devices
            .lock()
            .get(name)
            .cloned()
            .ok_or(Error::NoSuchFile)?;
        device.open(flags)
    }
}

/// A device is already registered with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlreadyRegistered;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryNode;

    #[test]
    fn devices_are_opened_by_name() {
        let registry = Registry::new();
        let node = MemoryNode::with_content(b"abc");
        assert_eq!(registry.register("mem", Arc::clone(&node) as Arc<dyn Device>), Ok(()));
        assert_eq!(
            registry.register("mem", MemoryNode::with_content(b"")),
            Err(AlreadyRegistered)
        );

        let opened = registry.open("mem", OpenFlags::READ_ONLY).unwrap();
        assert_eq!(node.opened(), 1);
        drop(opened);
        assert_eq!(node.opened(), 0);

        assert_eq!(
            registry.open("disk", OpenFlags::READ_ONLY).unwrap_err(),
            Error::NoSuchFile
        );
    }
}
