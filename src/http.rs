// LotKeeper - Administrative HTTP surface
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::KeeperError;
use crate::gateway::{fetch_round_state, LedgerWriter};
use crate::orchestrator::DrawOrchestrator;
use crate::pda::find_pot_vault_address;
use crate::resolver::DrawTrigger;
use crate::state::{lamports_to_sol, split_pot};

#[derive(Deserialize)]
struct DrawRequest {
    secret: String,
}

#[derive(Serialize)]
struct StatusResponse {
    round_id: u64,
    total_participants: u64,
    end_timestamp: u64,
    is_drawing: bool,
    winner_ticket_index: u64,
    ticket_price: u64,
    platform_fee_bps: u16,
    prize_pool_lamports: u64,
    prize_pool_sol: f64,
}

#[derive(Serialize)]
struct AckResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Serves the keeper's HTTP endpoints. Draw triggers are acknowledged
/// immediately and run in the background; the actual outcome is observed
/// through `/lottery/status`.
pub struct AdminServer<G: LedgerWriter + 'static> {
    orchestrator: Arc<DrawOrchestrator<G>>,
    gateway: Arc<G>,
    draw_secret: String,
}

impl<G: LedgerWriter + 'static> AdminServer<G> {
    pub fn new(
        orchestrator: Arc<DrawOrchestrator<G>>,
        gateway: Arc<G>,
        draw_secret: String,
    ) -> Self {
        Self {
            orchestrator,
            gateway,
            draw_secret,
        }
    }

    pub async fn serve(self: Arc<Self>, listen_addr: String) -> std::io::Result<()> {
        let listener = TcpListener::bind(&listen_addr).await?;
        println!("http listening on {}", listen_addr);
        loop {
            let (stream, _) = listener.accept().await?;
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                server.handle_client(stream).await;
            });
        }
    }

    async fn handle_client(&self, mut stream: TcpStream) {
        let req = match read_request(&mut stream).await {
            Ok(r) => r,
            Err(_) => return,
        };

        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/lottery/status") => self.status(&mut stream).await,
            ("POST", "/lottery/draw") => {
                let body = match serde_json::from_slice::<DrawRequest>(&req.body) {
                    Ok(b) => b,
                    Err(_) => return write_error(&mut stream, 400, "bad json").await,
                };
                if body.secret != self.draw_secret {
                    return write_error(&mut stream, 401, "bad secret").await;
                }
                self.spawn_draw();
                write_json(&mut stream, 202, &AckResponse { status: "accepted" }).await;
            }
            // Client-facing variant; rate limiting is the surrounding
            // service's concern.
            ("POST", "/lottery/trigger-draw") => {
                self.spawn_draw();
                write_json(&mut stream, 202, &AckResponse { status: "accepted" }).await;
            }
            _ => write_error(&mut stream, 404, "not found").await,
        }
    }

    async fn status(&self, stream: &mut TcpStream) {
        let program_id = self.orchestrator.program_id();
        let state = match fetch_round_state(self.gateway.as_ref(), &program_id).await {
            Ok(state) => state,
            Err(err) => return write_error(stream, 500, err.user_message()).await,
        };
        let (pot_vault, _) = find_pot_vault_address(&program_id);
        let pot_balance = match self.gateway.fetch_balance(&pot_vault).await {
            Ok(balance) => balance,
            Err(err) => return write_error(stream, 500, err.user_message()).await,
        };
        let (_, prize_pool) = split_pot(pot_balance, state.platform_fee_bps);

        let response = StatusResponse {
            round_id: state.round_id,
            total_participants: state.total_participants,
            end_timestamp: state.end_timestamp,
            is_drawing: state.is_drawing,
            winner_ticket_index: state.winner_ticket_index,
            ticket_price: state.ticket_price,
            platform_fee_bps: state.platform_fee_bps,
            prize_pool_lamports: prize_pool,
            prize_pool_sol: lamports_to_sol(prize_pool),
        };
        write_json(stream, 200, &response).await;
    }

    fn spawn_draw(&self) {
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::spawn(async move {
            match orchestrator.execute_draw().await {
                Ok(outcome) => println!("triggered draw finished: {:?}", outcome),
                Err(err) => eprintln!("triggered draw failed: {}", err),
            }
        });
    }
}

/// Client-side trigger that re-invokes the keeper's own trigger-draw
/// endpoint, so manual "check my result" actions share the keeper's
/// idempotency guarantees.
pub struct HttpDrawTrigger {
    pub keeper_addr: String,
}

#[async_trait]
impl DrawTrigger for HttpDrawTrigger {
    async fn trigger_draw(&self) -> Result<(), KeeperError> {
        let mut stream = TcpStream::connect(&self.keeper_addr)
            .await
            .map_err(|e| KeeperError::LedgerWrite(format!("keeper unreachable: {}", e)))?;
        let request = format!(
            "POST /lottery/trigger-draw HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            self.keeper_addr
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| KeeperError::LedgerWrite(format!("keeper unreachable: {}", e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|e| KeeperError::LedgerWrite(format!("keeper unreachable: {}", e)))?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buf[..n]);
            if response.len() >= 12 {
                break;
            }
        }
        let head = String::from_utf8_lossy(&response);
        if head.starts_with("HTTP/1.1 202") {
            Ok(())
        } else {
            Err(KeeperError::LedgerWrite(format!(
                "trigger rejected: {}",
                head.lines().next().unwrap_or("no response")
            )))
        }
    }
}

struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

async fn read_request(stream: &mut TcpStream) -> Result<Request, String> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf).await.map_err(|e| format!("{}", e))?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if data.len() > 65536 {
            return Err("request too large".into());
        }
    }
    let header_end = data
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or("bad request")?
        + 4;
    let header_bytes = &data[..header_end];
    let mut body = data[header_end..].to_vec();

    let req_str = String::from_utf8_lossy(header_bytes);
    let mut lines = req_str.split("\r\n");
    let line = lines.next().ok_or("bad request")?;
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or("bad method")?.to_string();
    let path = parts.next().ok_or("bad path")?.to_string();

    let mut content_len = 0usize;
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix("Content-Length:") {
            content_len = rest.trim().parse::<usize>().unwrap_or(0);
        }
    }

    if content_len > body.len() {
        let mut remaining = content_len.saturating_sub(body.len());
        while remaining > 0 {
            let mut buf = vec![0u8; remaining.min(4096)];
            let n = stream.read(&mut buf).await.map_err(|e| format!("{}", e))?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
            remaining = remaining.saturating_sub(n);
        }
    }

    Ok(Request { method, path, body })
}

async fn write_json<T: Serialize>(stream: &mut TcpStream, status: u16, body: &T) {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        202 => "HTTP/1.1 202 Accepted",
        400 => "HTTP/1.1 400 Bad Request",
        401 => "HTTP/1.1 401 Unauthorized",
        404 => "HTTP/1.1 404 Not Found",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let resp = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    let _ = stream.write_all(resp.as_bytes()).await;
}

async fn write_error(stream: &mut TcpStream, status: u16, message: &str) {
    write_json(
        stream,
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
    .await;
}
