//! CLI command implementations.
//!
//! | Module    | Commands handled                          |
//! |-----------|-------------------------------------------|
//! | `run`     | `Run`                                     |
//! | `review`  | `ReviewPr`                                |
//! | `view`    | `View`                                    |
//! | `plugins` | `Drivers`, `Forges`, `Sources`, `Scanners` |

pub mod plugins;
pub mod review;
pub mod run;
pub mod view;

pub use plugins::cmd_plugins;
pub use review::cmd_review;
pub use run::cmd_run;
pub use view::cmd_view;
