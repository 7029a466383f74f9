use lambda_runtime::Context;

const UNKNOWN: &str = "unknown";

/// Identity of the running function, taken from the invoked function ARN
/// (`arn:aws:lambda:<region>:<account>:function:<name>[:<qualifier>]`).
#[derive(Debug, Clone)]
pub struct AwsAttributes {
    pub region: String,
    pub account_id: String,
    pub function_name: String,
}

impl AwsAttributes {
    pub fn new(context: &Context) -> Self {
        Self::from_arn(&context.invoked_function_arn)
    }

    pub fn from_arn(arn: &str) -> Self {
        let parts: Vec<&str> = arn.split(':').collect();
        let part = |idx: usize| {
            parts
                .get(idx)
                .filter(|s| !s.is_empty())
                .copied()
                .unwrap_or(UNKNOWN)
                .to_string()
        };

        Self {
            region: part(3),
            account_id: part(4),
            function_name: part(6),
        }
    }
}
