mod user;
mod user_db;
mod user_mem;

pub use user::UserRepo;
pub use user_db::UserRepository;
pub use user_mem::MemoryUserRepository;
