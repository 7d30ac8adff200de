//! Authority doubles shared by the unit tests.

use async_trait::async_trait;
use registration_client::{
    ClientError, RegisterRequest, RegisterResponse, RegistrationAuthority, ResendRequest,
    UserInfo, VerifyRequest, VerifyResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

mockall::mock! {
    pub Authority {}

    #[async_trait]
    impl RegistrationAuthority for Authority {
        async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ClientError>;
        async fn verify_register(&self, request: &VerifyRequest) -> Result<VerifyResponse, ClientError>;
        async fn resend_otp(&self, request: &ResendRequest) -> Result<(), ClientError>;
    }
}

/// Canned answer from [`FakeAuthority`].
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Token(&'static str, Option<&'static str>),
    NoToken,
    Reject(u16, Option<&'static str>),
}

impl Reply {
    fn verify(self) -> Result<VerifyResponse, ClientError> {
        match self {
            Reply::Token(token, user_id) => Ok(VerifyResponse {
                token: Some(token.to_string()),
                user: Some(UserInfo {
                    user_id: user_id.map(str::to_string),
                }),
            }),
            Reply::NoToken => Ok(VerifyResponse::default()),
            Reply::Reject(status, message) => Err(rejected(status, message)),
        }
    }

    fn unit(self) -> Result<(), ClientError> {
        match self {
            Reply::Reject(status, message) => Err(rejected(status, message)),
            _ => Ok(()),
        }
    }
}

fn rejected(status: u16, message: Option<&'static str>) -> ClientError {
    ClientError::Rejected {
        status,
        message: message.map(str::to_string),
    }
}

/// Counting authority that can hold every call until released.
pub struct FakeAuthority {
    verify_reply: Mutex<Reply>,
    resend_reply: Mutex<Reply>,
    gated: bool,
    gate: Notify,
    register_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    resend_calls: AtomicUsize,
}

impl FakeAuthority {
    pub fn new(verify_reply: Reply) -> Arc<Self> {
        Arc::new(Self::build(verify_reply, false))
    }

    /// Calls block until [`FakeAuthority::release`] is called once per call.
    pub fn gated(verify_reply: Reply) -> Arc<Self> {
        Arc::new(Self::build(verify_reply, true))
    }

    fn build(verify_reply: Reply, gated: bool) -> Self {
        Self {
            verify_reply: Mutex::new(verify_reply),
            resend_reply: Mutex::new(Reply::NoToken),
            gated,
            gate: Notify::new(),
            register_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            resend_calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn set_verify_reply(&self, reply: Reply) {
        *self.verify_reply.lock().unwrap() = reply;
    }

    pub fn set_resend_reply(&self, reply: Reply) {
        *self.resend_reply.lock().unwrap() = reply;
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn resend_calls(&self) -> usize {
        self.resend_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.gated {
            self.gate.notified().await;
        }
    }
}

#[async_trait]
impl RegistrationAuthority for FakeAuthority {
    async fn register(&self, _request: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Ok(RegisterResponse {
            message: Some("Verification code sent".into()),
        })
    }

    async fn verify_register(
        &self,
        _request: &VerifyRequest,
    ) -> Result<VerifyResponse, ClientError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        let reply = *self.verify_reply.lock().unwrap();
        reply.verify()
    }

    async fn resend_otp(&self, _request: &ResendRequest) -> Result<(), ClientError> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        let reply = *self.resend_reply.lock().unwrap();
        reply.unit()
    }
}
