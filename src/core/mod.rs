//! core components and types used throughout this library

/// Counter type defining the storage words a dense counts array can be built from.
pub mod counter;
