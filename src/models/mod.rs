pub mod ir;
pub mod report;
pub mod scenario;
pub mod stub;

pub use ir::{
    BodyKind, BodySpec, HttpMethod, LatencySpec, MatchValue, RequestDescriptor, ResponseVariant,
    StateHints, Transaction,
};
pub use report::{ConversionCounts, ConversionReport, WriterInfo};
pub use scenario::{ScenarioAnalysis, ScenarioPatterns, ScenarioStatistics};
pub use stub::{
    BodyPattern, Delay, DelayDistribution, RequestPattern, ResponseBody, ResponseDefinition,
    StringPattern, StubMapping, StubMetadata,
};
