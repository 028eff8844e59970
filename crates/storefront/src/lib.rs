//! Bookstore storefront library.
//!
//! Catalog, cart, wishlist, reviews and management endpoints over
//! `PostgreSQL`. Anonymous visitors keep their cart and wishlist in the
//! session; `POST /account/sync` merges them into the account after sign-in.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
