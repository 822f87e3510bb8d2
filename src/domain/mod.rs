// Domain layer: core models and ports. Concrete adapters live in tally/, db/, llm/.

pub mod model;
pub mod ports;
