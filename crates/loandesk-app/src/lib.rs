// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod fetch;
pub mod forms;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod state;
pub mod view;
pub mod workflow;

pub use fetch::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use state::*;
pub use view::*;
pub use workflow::*;
