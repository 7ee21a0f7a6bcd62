//! # Repository Module
//!
//! Database repository implementations for Chroma.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  UI / CLI                                                              │
//! │       │                                                                 │
//! │       │  db.products().search("dragon")                                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── create(&mut product)     products + color_specifications +        │
//! │  ├── update(&mut product)     color_pieces, one transaction            │
//! │  ├── get / list_all / search / find_by_color                           │
//! │  ├── delete(id)               cascades to specifications and pieces    │
//! │  └── available_colors / statistics   (aggregate SQL, no hydration)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows never leave this module: callers see only chroma-core entities.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product aggregate
//!   CRUD, search and catalog statistics

pub mod product;
