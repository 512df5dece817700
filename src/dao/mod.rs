/// Persistence entities shared by every store backend.
pub mod models;
/// Validated room operations on top of a [`room_store::RoomStore`].
pub mod room_repository;
/// Room and match result storage backends.
pub mod room_store;
/// Storage abstraction layer errors.
pub mod storage;
