mod lifecycle;
mod protocol;

pub use lifecycle::{remove_socket, socket_path};
pub use protocol::{
    methods, BackupParams, QueryParams, Request, RequestId, Response, RestoreParams, RpcError,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
