pub mod use_cases;

pub use use_cases::enhance::EnhanceUseCase;
pub use use_cases::qa_api_call::QaApiCallUseCase;
pub use use_cases::qa_event::QaEventUseCase;
pub use use_cases::qa_run::QaRunUseCase;
pub use use_cases::qa_session::QaSessionUseCase;
pub use use_cases::rag_ingestion::RagIngestionUseCase;
pub use use_cases::retrieval_service::QueryResult;
pub use use_cases::translate::TranslateUseCase;
pub use use_cases::typegen::TypeGenUseCase;
