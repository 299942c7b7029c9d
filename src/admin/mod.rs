//! 管理监控推送服务器
//!
//! 轻量级 WebSocket 服务器，随仪表盘启动，将每次采样产生的
//! aura_update 事件实时推送给所有已连接的监控端，并向新连接
//! 回放最近若干条事件。

use crate::session::AuraUpdate;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::accept_async;
use tungstenite::protocol::Message;

/// 推送消息类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedMessage {
    /// 一次采样结果
    #[serde(rename = "aura_update")]
    AuraUpdate(AuraUpdate),
}

/// 客户端发送器
struct ClientSender {
    sender: mpsc::UnboundedSender<String>,
}

/// 服务器状态
struct FeedState {
    clients: HashMap<String, ClientSender>,
    recent: VecDeque<AuraUpdate>,
    replay_cap: usize,
}

impl FeedState {
    fn new(replay_cap: usize) -> Self {
        Self {
            clients: HashMap::new(),
            recent: VecDeque::with_capacity(replay_cap),
            replay_cap: replay_cap.max(1),
        }
    }

    /// 记录事件并推送给所有客户端
    fn publish(&mut self, update: AuraUpdate) {
        if self.recent.len() >= self.replay_cap {
            self.recent.pop_front();
        }
        self.recent.push_back(update.clone());

        if let Ok(json) = serde_json::to_string(&FeedMessage::AuraUpdate(update)) {
            for sender in self.clients.values() {
                let _ = sender.sender.send(json.clone());
            }
        }
    }

    /// 向单个客户端回放最近事件，按时间先后顺序
    fn replay_to(&self, client_id: &str) {
        let Some(sender) = self.clients.get(client_id) else {
            return;
        };
        for update in &self.recent {
            if let Ok(json) = serde_json::to_string(&FeedMessage::AuraUpdate(update.clone())) {
                let _ = sender.sender.send(json);
            }
        }
    }
}

/// 监控推送服务器
pub struct AuraFeedServer {
    port: u16,
    state: Arc<RwLock<FeedState>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl AuraFeedServer {
    pub fn new(port: u16, replay_cap: usize) -> Self {
        Self {
            port,
            state: Arc::new(RwLock::new(FeedState::new(replay_cap))),
            shutdown_tx: None,
        }
    }

    /// 启动服务器，返回实际监听端口
    pub async fn start(&mut self) -> Result<u16> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();
        self.port = actual_port;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        let state = self.state.clone();

        tracing::info!("监控推送服务器启动: 0.0.0.0:{}", actual_port);

        tokio::spawn(async move {
            let mut shutdown_rx = shutdown_tx.subscribe();
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let client_id = format!("monitor_{}", addr.port());
                                let state = state.clone();
                                tokio::spawn(handle_client(stream, client_id, state));
                            }
                            Err(e) => {
                                tracing::error!("接受连接失败: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("监控推送服务器关闭");
                        break;
                    }
                }
            }
        });

        Ok(actual_port)
    }

    /// 把会话事件流转发给所有监控端，直到会话结束
    pub fn forward(&self, mut rx: broadcast::Receiver<AuraUpdate>) {
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(update) => {
                        state.write().await.publish(update);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("监控推送滞后，丢弃 {} 条事件", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// 停止服务器
    pub fn stop(&self) {
        if let Some(ref tx) = self.shutdown_tx {
            let _ = tx.send(());
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// 处理监控端连接
async fn handle_client(stream: TcpStream, client_id: String, state: Arc<RwLock<FeedState>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!("WebSocket 握手失败: {}", e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // 注册客户端并回放最近事件
    {
        let mut state = state.write().await;
        state.clients.insert(client_id.clone(), ClientSender { sender: tx });
        state.replay_to(&client_id);
    }

    tracing::info!("监控端连接: {}", client_id);

    // 发送任务
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // 接收任务: 推送是单向的，只响应 Ping/Close
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!("接收错误: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    // 清理
    state.write().await.clients.remove(&client_id);

    tracing::info!("监控端断开: {}", client_id);
}
