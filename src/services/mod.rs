/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Result persistence and quorum detection.
pub mod match_coordinator;
/// Result submission and ranking fan-out.
pub mod match_service;
/// Collaborative question set generation.
pub mod question_service;
/// Realtime room event payloads.
pub mod room_events;
/// Room lifecycle operations.
pub mod room_service;
/// Leaderboard and personal statistics.
pub mod stats_service;
/// Background storage connection supervisor.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
