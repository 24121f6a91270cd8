// Pipeline components and shared errors/models
pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod dedup_cache {
    pub use crate::dedup_cache::*;
}

pub mod validator {
    pub use crate::validator::*;
}

pub mod output {
    pub use crate::output::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
