use thiserror::Error;

/// Failure while executing a compiled template.
#[derive(Debug, Error)]
pub enum RenderError {
	#[error("unknown filter '{0}'")]
	UnknownFilter(String),

	#[error("unknown test '{0}'")]
	UnknownTest(String),

	#[error("unknown function '{0}'")]
	UnknownFunction(String),

	#[error("no handler registered for directive '{0}'")]
	UnknownExtension(String),

	#[error("template '{0}' not found")]
	TemplateNotFound(String),

	#[error("failed to compile template '{name}': {source}")]
	Compile {
		name: String,
		#[source]
		source: reinhardt_lang_core::Error,
	},

	#[error("type error: {0}")]
	Type(String),

	#[error("division by zero")]
	DivisionByZero,

	#[error("expression is not callable")]
	NotCallable,

	#[error("macro '{name}' called without argument '{param}'")]
	MissingArgument { name: String, param: String },

	#[error("nesting deeper than {0} macro calls or includes")]
	RecursionLimit(usize),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl RenderError {
	pub(crate) fn type_error(message: impl Into<String>) -> Self {
		RenderError::Type(message.into())
	}
}
