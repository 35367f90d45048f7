pub mod bloom;

pub use bloom::MembershipFilter;
