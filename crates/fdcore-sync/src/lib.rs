//! Synchronization primitives used by the file descriptor subsystem. Currently, it just
//! reexports some objects from the `spin` crate so the rest of the code does not depend
//! on a particular lock implementation and can switch to a kernel-provided one later.
#![no_std]

pub type Spinlock<T> = spin::Mutex<T>;
pub type Once<T> = spin::Once<T>;
