/// Runs a fallible step; on error the failure is recorded against the map slot
/// and the expression evaluates to `None`.
macro_rules! try_or_record {
    ($incidents:expr, $slot:expr, $operation:expr, $value:expr) => {
        match $value {
            Ok(v) => Some(v),
            Err(err) => {
                $incidents.record($slot, $operation, &err);
                None
            }
        }
    };
}
