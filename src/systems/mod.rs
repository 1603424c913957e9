mod bookkeeping;
pub mod diplomacy;
mod frontier;
pub mod lifecycle;
pub mod technology;
pub mod war;

pub use bookkeeping::BookkeepingSystem;
pub use diplomacy::DiplomacySystem;
pub use frontier::FrontierSystem;
pub use lifecycle::LifecycleSystem;
pub use technology::TechnologySystem;
pub use war::WarSystem;
