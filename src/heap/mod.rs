pub mod children;
pub mod heap;
pub mod mark;
pub mod marking;
pub mod marking_context;
pub mod object;
pub mod runtime;
pub mod script;
pub mod shape;
pub mod string;
pub mod thing;
pub mod tracer;
pub mod types;
pub mod value;
pub mod xml;
