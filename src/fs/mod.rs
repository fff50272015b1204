use crate::{
    device::Registry,
    prelude::*,
    vfs::{
        file::{Mode, OpenFlags},
        node::{Error, Filesystem, NodeRef},
    },
};

pub mod ramfs;

/// The filesystem seen by tasks. A path of the form `name:` designates the device
/// registered as `name`, and every other path is resolved by the root filesystem.
pub struct Namespace {
    root: Arc<dyn Filesystem>,
    devices: Registry,
}

impl Namespace {
    #[must_use]
    pub fn new(root: Arc<dyn Filesystem>) -> Self {
        Self {
            root,
            devices: Registry::new(),
        }
    }

    /// Returns the devices reachable through this namespace.
    #[must_use]
    pub fn devices(&self) -> &Registry {
        &self.devices
    }
}

impl Filesystem for Namespace {
    fn open(&self, path: &str, flags: OpenFlags, mode: Mode) -> Result<NodeRef, Error> {
        match split_device(path) {
            // Devices are not directories
            Some((_, rest)) if !rest.is_empty() => Err(Error::NotADirectory),
            Some((device, _)) => self.devices.open(device, flags),
            None => self.root.open(path, flags, mode),
        }
    }
}

/// Split a path of the form `device:rest` into the device name and the rest of the
/// path. Returns `None` if the path does not start with a device name.
fn split_device(path: &str) -> Option<(&str, &str)> {
    let (device, rest) = path.split_once(':')?;
    (!device.is_empty() && !device.contains('/')).then_some((device, rest))
}
