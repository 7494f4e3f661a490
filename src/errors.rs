use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum AppError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Unauthorized(String),
    Serialization(String),
    CalculationFailed(String),
}

impl AppError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseConfig(_) => "E001",
            AppError::DatabaseConnection(_) => "E002",
            AppError::DatabaseOperation(_) => "E003",
            AppError::FileOperation(_) => "E004",
            AppError::Validation(_) => "E005",
            AppError::NotFound(_) => "E006",
            AppError::Unauthorized(_) => "E007",
            AppError::Serialization(_) => "E008",
            AppError::CalculationFailed(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::DatabaseConfig(_) => "Database Configuration Error",
            AppError::DatabaseConnection(_) => "Database Connection Error",
            AppError::DatabaseOperation(_) => "Database Operation Error",
            AppError::FileOperation(_) => "File Operation Error",
            AppError::Validation(_) => "Validation Error",
            AppError::NotFound(_) => "Resource Not Found",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Serialization(_) => "Serialization Error",
            AppError::CalculationFailed(_) => "Calculation Failed",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AppError::DatabaseConfig(msg)
            | AppError::DatabaseConnection(msg)
            | AppError::DatabaseOperation(msg)
            | AppError::FileOperation(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Serialization(msg)
            | AppError::CalculationFailed(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AppError {}

// 便捷的构造函数
impl AppError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AppError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AppError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AppError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        AppError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AppError::Serialization(msg.into())
    }

    pub fn calculation_failed<T: Into<String>>(msg: T) -> Self {
        AppError::CalculationFailed(msg.into())
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
