//! Gateway response codes.

/// `vnp_ResponseCode` / `vnp_TransactionStatus` value meaning success.
pub const RESPONSE_SUCCESS: &str = "00";

/// Human-readable description of a gateway response code.
pub fn describe_response_code(code: &str) -> &'static str {
    match code {
        "00" => "Successful transaction",
        "01" => "Transaction not completed",
        "02" => "Transaction error",
        "03" => "Invalid merchant",
        "04" => "Invalid transaction",
        "05" => "Transaction not found",
        "06" => "System error",
        "07" => "Transaction made but pending for approval",
        "08" => "Transaction rejected by bank",
        "09" => "Transaction has been cancelled",
        "10" => "Transaction cancelled by customer",
        "11" => "Transaction expired",
        "12" => "Transaction with invalid amount",
        "13" => "Transaction with invalid currency",
        "24" => "Customer cancelled the transaction",
        "51" => "Not enough balance",
        "65" => "Maximum transaction limit exceeded",
        "75" => "Maximum transaction attempts exceeded",
        "79" => "Authentication failed",
        "99" => "Other errors",
        _ => "Unknown error",
    }
}
