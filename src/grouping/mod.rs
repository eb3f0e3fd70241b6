//! Group assignment for round-robin style sub-brackets

pub mod assigner;

pub use assigner::{
    assign_round_robin, group_label, reassign_group, GroupAssigner, GroupAssignment,
    RoundRobinGroupAssigner,
};
