/*
 * This module provides data aquisition abilities for the application.
 * It doesn't care what the devices report, just how it is fetched: NX-API or SSH for switches,
 * Redfish for BMCs. Parsing happens in `parsers`.
 */

pub mod core;
pub mod nxapi;
pub mod redfish;
pub mod ssh;
