//! Optional UDP responder. Non-authoritative: answers single-question
//! queries for the eight record types this store accepts, against the
//! oldest matching `(name, type)` row across every environment. Zone
//! transfers (AXFR/IXFR) and any record type outside A/AAAA/CNAME/MX/TXT/
//! NS/SRV/PTR return NOTIMP. No DNSSEC, no recursion.

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType as HickoryRecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

use crate::{models::RecordType, repository::DnsRecordRepository};

const MAX_UDP_PACKET: usize = 512;

pub struct UdpResponder<R: DnsRecordRepository> {
    repository: Arc<R>,
}

impl<R: DnsRecordRepository + 'static> UdpResponder<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Binds the configured port and serves until the process exits; each
    /// datagram is handled on its own task so one slow lookup cannot stall
    /// the socket.
    pub async fn serve(self, bind_addr: SocketAddr) -> std::io::Result<()> {
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        tracing::info!(%bind_addr, "DNS UDP responder listening");

        let mut buf = [0u8; MAX_UDP_PACKET];
        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;
            let datagram = buf[..len].to_vec();
            let repository = self.repository.clone();
            let socket = socket.clone();

            tokio::spawn(async move {
                if let Some(response) = handle_datagram(repository.as_ref(), &datagram).await {
                    if let Ok(bytes) = response.to_bytes() {
                        let _ = socket.send_to(&bytes, peer).await;
                    }
                }
            });
        }
    }
}

async fn handle_datagram<R: DnsRecordRepository>(repository: &R, datagram: &[u8]) -> Option<Message> {
    let request = match Message::from_bytes(datagram) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable DNS datagram");
            return None;
        }
    };

    let query = request.queries().first()?.clone();
    let mut response = new_response(&request);

    let Some(record_type) = from_hickory(query.query_type()) else {
        response.set_response_code(ResponseCode::NotImp);
        return Some(response);
    };

    let name = query.name().to_utf8();
    match repository.find_oldest_match(name.trim_end_matches('.'), record_type).await {
        Ok(Some(record)) => match to_hickory_record(&record, query.name().clone()) {
            Some(rr) => {
                response.add_answer(rr);
                response.set_response_code(ResponseCode::NoError);
            }
            None => response.set_response_code(ResponseCode::ServFail),
        },
        Ok(None) => {
            response.set_response_code(ResponseCode::NXDomain);
        }
        Err(e) => {
            tracing::warn!(error = %e, "DNS lookup failed");
            response.set_response_code(ResponseCode::ServFail);
        }
    }

    Some(response)
}

fn new_response(request: &Message) -> Message {
    let mut response = Message::new();
    response.set_id(request.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(request.op_code());
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(false);
    for query in request.queries() {
        response.add_query(query.clone());
    }
    response
}

fn from_hickory(record_type: HickoryRecordType) -> Option<RecordType> {
    match record_type {
        HickoryRecordType::A => Some(RecordType::A),
        HickoryRecordType::AAAA => Some(RecordType::AAAA),
        HickoryRecordType::CNAME => Some(RecordType::CNAME),
        HickoryRecordType::MX => Some(RecordType::MX),
        HickoryRecordType::TXT => Some(RecordType::TXT),
        HickoryRecordType::NS => Some(RecordType::NS),
        HickoryRecordType::SRV => Some(RecordType::SRV),
        HickoryRecordType::PTR => Some(RecordType::PTR),
        // AXFR/IXFR and anything else this store doesn't carry.
        _ => None,
    }
}

/// Splits TXT content into <=255-byte chunks per the character-string wire
/// format; every other type stores one scalar value.
fn chunk_txt(value: &str) -> Vec<String> {
    value
        .as_bytes()
        .chunks(255)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

fn to_hickory_record(record: &crate::models::DnsRecord, name: Name) -> Option<Record> {
    let rdata = match record.record_type {
        RecordType::A => RData::A(A(record.value.parse().ok()?)),
        RecordType::AAAA => RData::AAAA(AAAA(record.value.parse().ok()?)),
        RecordType::CNAME => RData::CNAME(CNAME(Name::from_utf8(&record.value).ok()?)),
        RecordType::NS => RData::NS(NS(Name::from_utf8(&record.value).ok()?)),
        RecordType::PTR => RData::PTR(PTR(Name::from_utf8(&record.value).ok()?)),
        RecordType::MX => RData::MX(MX::new(
            record.priority.unwrap_or(0) as u16,
            Name::from_utf8(&record.value).ok()?,
        )),
        RecordType::SRV => RData::SRV(SRV::new(
            record.priority.unwrap_or(0) as u16,
            record.weight.unwrap_or(0) as u16,
            record.port.unwrap_or(0) as u16,
            Name::from_utf8(&record.value).ok()?,
        )),
        RecordType::TXT => RData::TXT(TXT::new(chunk_txt(&record.value))),
    };

    Some(Record::from_rdata(name, record.ttl.max(0) as u32, rdata))
}
