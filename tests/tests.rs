#![allow(unexpected_cfgs)]

#[cfg(not(rendez_loom))]
mod general;
