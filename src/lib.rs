/*
 *  lib.rs
 *
 *  osdcast - pixels over datagrams
 *  (c) 2024-26 the osdcast authors
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! osdcast: a UDP-driven overlay runtime. Up to 8 bar/text assets bound to
//! 16 data channels, patched over a small JSON datagram protocol and pushed
//! to an external draw surface at a throttled rate.

pub mod assets;
pub mod channels;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod patch;
pub mod render;
pub mod scheduler;
pub mod segment;
pub mod stats;
pub mod surface;
