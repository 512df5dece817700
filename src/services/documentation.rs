use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification of the trivia rooms backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::client_config::client_config,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::leave_room,
        crate::routes::rooms::configure_player,
        crate::routes::rooms::start_match,
        crate::routes::games::generate_questions,
        crate::routes::games::submit_result,
        crate::routes::stats::leaderboard,
        crate::routes::stats::user_stats,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::client_config::ClientConfigResponse,
            crate::dto::room::PlayerInput,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::RoomMemberRequest,
            crate::dto::room::ConfigurePlayerRequest,
            crate::dto::room::PlayerView,
            crate::dto::room::RoomView,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomResponse,
            crate::dto::room::LeaveRoomResponse,
            crate::dto::room::StartMatchResponse,
            crate::dto::questions::GenerateQuestionsRequest,
            crate::dto::questions::GenerateQuestionsResponse,
            crate::dto::questions::QuestionView,
            crate::dto::match_result::SubmitResultRequest,
            crate::dto::match_result::SubmitResultResponse,
            crate::dto::match_result::WaitingForPlayers,
            crate::dto::match_result::MatchFinished,
            crate::dto::match_result::RankingEntryView,
            crate::dto::stats::LeaderboardResponse,
            crate::dto::stats::LeaderboardEntryView,
            crate::dto::stats::UserStatsResponse,
            crate::dto::stats::MatchHistoryEntry,
            crate::dto::ws::UserJoinedEvent,
            crate::dto::ws::UserLeftEvent,
            crate::dto::ws::UserConfiguredEvent,
            crate::dto::ws::GameStartedEvent,
            crate::dto::ws::ErrorEvent,
            crate::state::room::Difficulty,
            crate::state::room::RoomStatus,
        )
    ),
    tags(
        (name = "health", description = "Health and client configuration"),
        (name = "rooms", description = "Room lifecycle"),
        (name = "games", description = "Question generation and result reporting"),
        (name = "stats", description = "Leaderboard and personal statistics"),
        (name = "realtime", description = "WebSocket room events"),
    )
)]
pub struct ApiDoc;
